pub mod nalu;

pub use nalu::{
    split_annexb, split_length_prefixed, to_annexb, to_length_prefixed, Nalu, NaluKind,
};
