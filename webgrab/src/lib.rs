mod client;
mod page;
mod weburl;

pub use client::*;
pub use page::*;
pub use weburl::*;
