pub mod prelude;

pub mod appointment;
pub mod bonus_transaction;
pub mod promo_code;
pub mod promo_code_service;
pub mod review;
pub mod sea_orm_active_enums;
pub mod service;
pub mod site_setting;
pub mod specialist;
pub mod user;
