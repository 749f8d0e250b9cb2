pub mod agent;
pub mod cancel;
pub mod context;
pub mod document;
pub mod emitter;
pub mod ids;
pub mod packet;
pub mod tokens;
pub mod tools;
