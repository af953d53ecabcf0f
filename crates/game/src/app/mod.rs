mod bootstrap;
pub(crate) mod level;

pub(crate) use bootstrap::build_app;
