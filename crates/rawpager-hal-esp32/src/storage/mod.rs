#[cfg(target_arch = "xtensa")]
pub mod flash_settings;
pub mod record;
