pub(crate) mod code_dispatch;
pub(crate) mod database;
pub(crate) mod ephemeral_store;
pub(crate) mod logging;
pub(crate) mod settings;
