use anyhow::Result;

/// A hook invoked between encoding and decoding in a [`roundtrip`](super::roundtrip).
///
/// Implement this trait to put the stego PNG through whatever it will meet in
/// practice before it is decoded again, for example an upload and download
/// through a service that must preserve the file.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use pixelveil::PipelineHook;
///
/// struct ReencodeHook;
///
/// impl PipelineHook for ReencodeHook {
///     fn after_encode(&self, stego_png: Vec<u8>) -> Result<Vec<u8>> {
///         // send the PNG somewhere and fetch it back ...
///         Ok(stego_png)
///     }
/// }
/// ```
pub trait PipelineHook {
    /// Called with the freshly encoded PNG bytes. Returns the bytes to decode.
    fn after_encode(&self, stego_png: Vec<u8>) -> Result<Vec<u8>>;
}

/// A no-op hook that passes the encoded PNG through unchanged.
pub struct NoopHook;

impl PipelineHook for NoopHook {
    fn after_encode(&self, stego_png: Vec<u8>) -> Result<Vec<u8>> {
        Ok(stego_png)
    }
}
