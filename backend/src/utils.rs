/// Current wall clock in unix milliseconds, the unit every stored timestamp uses.
pub fn now_millis() -> u64 {
    chrono::Local::now().timestamp_millis() as u64
}
