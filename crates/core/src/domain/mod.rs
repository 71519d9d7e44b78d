pub mod company;
pub mod market;
pub mod sentiment;
pub mod view;
