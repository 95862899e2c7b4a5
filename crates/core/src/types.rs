/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Zero-based GPU index as reported by the driver.
pub type GpuIndex = u32;
