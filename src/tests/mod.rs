mod scheduler_tests;
mod utils;
