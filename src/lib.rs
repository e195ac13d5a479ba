pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::app::spam::SpamService;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub admin_token: Option<String>,
    pub spam: SpamService,
}
