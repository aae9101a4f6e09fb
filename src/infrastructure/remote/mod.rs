//! Client for the remote streaming execution service
//!
//! Calls are offloaded as a single POST; the response body is decoded lazily,
//! one Item per line, with the decoder picked from the encoding scheme header.

pub mod client;
pub mod codec;
pub mod errors;
pub mod npy;
pub mod retry;
pub mod stream;

pub use client::{RemoteClient, RemoteClientConfig, RemoteEndpoint, ROW_COUNT_HEADER};
pub use codec::{CodecError, EncodingScheme, ENCODING_SCHEME_HEADER};
pub use errors::RemoteError;
pub use npy::{read_npy, write_npy, NpyError};
pub use retry::RetryPolicy;
pub use stream::LineDecoderStream;
