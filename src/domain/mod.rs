pub mod activity;
pub mod business;
pub mod edits;
pub mod message;
pub mod notification;
pub mod spam;
