pub use super::appointment::Entity as Appointment;
pub use super::bonus_transaction::Entity as BonusTransaction;
pub use super::promo_code::Entity as PromoCode;
pub use super::promo_code_service::Entity as PromoCodeService;
pub use super::review::Entity as Review;
pub use super::service::Entity as Service;
pub use super::site_setting::Entity as SiteSetting;
pub use super::specialist::Entity as Specialist;
pub use super::user::Entity as User;
