// tests/property/main.rs

mod readiness;
