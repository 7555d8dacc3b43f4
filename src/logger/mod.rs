//! Operational logging: append-only JSONL with rotation and graceful degradation.

pub mod jsonl;
