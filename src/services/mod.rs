pub mod capture;
pub mod history;
pub mod prune;
pub mod transfer;
