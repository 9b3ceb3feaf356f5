use super::PlatformExtensions;

pub struct Platform;

// Non-Linux hosts have no procfs; callers fall back to conventional values.
impl PlatformExtensions for Platform {
    fn clock_ticks_per_second() -> Option<u64> {
        None
    }

    fn page_size() -> Option<u64> {
        None
    }

    fn online_cpus() -> Option<u32> {
        None
    }
}
