use super::PlatformExtensions;

pub struct Platform;

fn sysconf(name: libc::c_int) -> Option<u64> {
    // sysconf has no preconditions; -1 signals an unsupported name.
    let value = unsafe { libc::sysconf(name) };
    (value > 0).then_some(value as u64)
}

impl PlatformExtensions for Platform {
    fn clock_ticks_per_second() -> Option<u64> {
        sysconf(libc::_SC_CLK_TCK)
    }

    fn page_size() -> Option<u64> {
        sysconf(libc::_SC_PAGESIZE)
    }

    fn online_cpus() -> Option<u32> {
        sysconf(libc::_SC_NPROCESSORS_ONLN).map(|n| n as u32)
    }
}
