// Persisted files, remote wire formats, and what the program works with
pub mod logical;
pub mod remote;
pub mod storage;
