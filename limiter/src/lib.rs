use middleware::global::GlobalLimiter;

pub mod gate;

pub mod middleware {
    pub mod global;
}

pub fn global_middleware(permits_per_second: u32) -> GlobalLimiter {
    GlobalLimiter::new(permits_per_second)
}
