pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod order_status;
pub mod orders;
pub mod pricing;
pub mod verification;
