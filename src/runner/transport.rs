//! Runner transport layer
//!
//! Frames are JSON bodies prefixed with their length as a little-endian
//! `u32`. The same framing runs over the runner's stdio pipes or over a
//! local socket (Unix domain socket / Windows named pipe via interprocess).

use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum message size (10 MB)
const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

#[cfg(unix)]
pub mod platform {
    pub use interprocess::local_socket::tokio::{prelude::*, Stream};
    pub use interprocess::local_socket::GenericFilePath;
}

#[cfg(windows)]
pub mod platform {
    pub use interprocess::local_socket::tokio::{prelude::*, Stream};
    pub use interprocess::local_socket::GenericNamespaced;
}

use platform::*;

pub use platform::Stream;

/// Connect to a runner listening on the local socket `name`
pub async fn connect(name: &str) -> io::Result<Stream> {
    #[cfg(unix)]
    let stream = {
        let name = name.to_fs_name::<GenericFilePath>()?;
        Stream::connect(name).await?
    };

    #[cfg(windows)]
    let stream = {
        let name = name.to_ns_name::<GenericNamespaced>()?;
        Stream::connect(name).await?
    };

    Ok(stream)
}

/// Send a length-prefixed message
pub async fn send_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Message too large",
        ));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Receive a length-prefixed message
pub async fn recv_message<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_frame_is_length_prefixed() {
        let mut output = Vec::new();
        send_message(&mut output, b"{\"id\":1}").await.unwrap();
        assert_eq!(&output[..4], &8u32.to_le_bytes());
        assert_eq!(&output[4..], b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_recv_reads_one_frame() {
        let mut data = 2u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"{}trailing");
        let mut reader = Cursor::new(data);
        assert_eq!(recv_message(&mut reader).await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mut reader = Cursor::new((MAX_MESSAGE_SIZE + 1).to_le_bytes().to_vec());
        let err = recv_message(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_eof() {
        let mut data = 10u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"abc");
        let mut reader = Cursor::new(data);
        let err = recv_message(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
