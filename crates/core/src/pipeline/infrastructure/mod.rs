pub mod jsonl_frame_source;
