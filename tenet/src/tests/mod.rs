mod simplify;

// Model tests
mod transaction;

mod matcher;
