pub mod import;
pub mod inspect;
pub mod status;
