//!
//!
pub mod archive; // walks the code entries of one project archive
pub mod extract; // per-language function-body extraction
pub mod language; // the language profile and its comment patterns
pub mod output; // output layout bootstrap and the per-worker sidecar streams
pub mod pool; // parent/worker scheduling and file-id partitioning
pub mod settings; // handles configuration of the run
pub mod text; // line accounting, comment stripping, token bags, hashing
pub mod tokenize; // the file- and block-granularity pipelines
