pub mod ws;

pub use ws::WsChannel;
