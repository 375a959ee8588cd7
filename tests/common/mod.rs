#![allow(dead_code)]

pub mod book_server;
