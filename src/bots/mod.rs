pub mod digest_bot;
