pub mod eol;
pub mod health;

pub use eol::{
    analyze_job_handler, auth_check_handler, fetch_url_handler, get_auto_check_handler,
    initialize_job_handler, job_status_handler, set_auto_check_handler,
};
pub use health::health_handler;
