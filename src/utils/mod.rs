pub mod telegram_admin;
