pub mod balance;
pub mod decision;
pub mod exchange;
pub mod market;
pub mod order;
pub mod order_book;
