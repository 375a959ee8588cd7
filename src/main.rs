use chrono::Local;
use bookfetch::{info_time, process::run, FetchConfig};

#[tokio::main]
async fn main() {
    let start_time = Local::now();
    run(&FetchConfig::default()).await;
    info_time!(start_time, "Full program time:");
}
