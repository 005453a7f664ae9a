//! Side-effecting adapters: processes, network, filesystem, git, browser.

pub mod browser;
pub mod git;
pub mod governor;
pub mod http;
pub mod load;
pub mod process;
pub mod report;
pub mod service;
