// Word and sentence framing for the RouterOS API
use rw_core::ClientError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Encode a word length prefix.
pub fn encode_length(len: usize) -> Vec<u8> {
    let len = len as u32;
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        (len | 0x8000).to_be_bytes()[2..].to_vec()
    } else if len < 0x20_0000 {
        (len | 0xC0_0000).to_be_bytes()[1..].to_vec()
    } else if len < 0x1000_0000 {
        (len | 0xE000_0000).to_be_bytes().to_vec()
    } else {
        let mut out = vec![0xF0];
        out.extend_from_slice(&len.to_be_bytes());
        out
    }
}

pub async fn read_length<R>(reader: &mut R) -> Result<usize, ClientError>
where
    R: AsyncRead + Unpin,
{
    let first = reader.read_u8().await?;

    let (extra, initial) = if first & 0x80 == 0 {
        (0, first as u32)
    } else if first & 0xC0 == 0x80 {
        (1, (first & 0x3F) as u32)
    } else if first & 0xE0 == 0xC0 {
        (2, (first & 0x1F) as u32)
    } else if first & 0xF0 == 0xE0 {
        (3, (first & 0x0F) as u32)
    } else if first == 0xF0 {
        (4, 0)
    } else {
        return Err(ClientError::Protocol(format!(
            "unexpected control byte 0x{:02x} in length prefix",
            first
        )));
    };

    let mut len = initial;
    for _ in 0..extra {
        len = (len << 8) | reader.read_u8().await? as u32;
    }

    Ok(len as usize)
}

pub async fn write_word<W>(writer: &mut W, word: &str) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode_length(word.len())).await?;
    writer.write_all(word.as_bytes()).await?;
    Ok(())
}

/// Write the words followed by the zero-length terminator and flush.
pub async fn write_sentence<W, S>(writer: &mut W, words: &[S]) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    for word in words {
        write_word(writer, word.as_ref()).await?;
    }
    writer.write_u8(0).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_word<R>(reader: &mut R) -> Result<String, ClientError>
where
    R: AsyncRead + Unpin,
{
    let len = read_length(reader).await?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    // Rule comments are not guaranteed to be UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub async fn read_sentence<R>(reader: &mut R) -> Result<Vec<String>, ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let word = read_word(reader).await?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(word);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_encoding_boundaries() {
        assert_eq!(encode_length(0), vec![0x00]);
        assert_eq!(encode_length(0x7F), vec![0x7F]);
        assert_eq!(encode_length(0x80), vec![0x80, 0x80]);
        assert_eq!(encode_length(0x3FFF), vec![0xBF, 0xFF]);
        assert_eq!(encode_length(0x4000), vec![0xC0, 0x40, 0x00]);
        assert_eq!(encode_length(0x1F_FFFF), vec![0xDF, 0xFF, 0xFF]);
        assert_eq!(encode_length(0x20_0000), vec![0xE0, 0x20, 0x00, 0x00]);
        assert_eq!(encode_length(0xFFF_FFFF), vec![0xEF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            encode_length(0x1000_0000),
            vec![0xF0, 0x10, 0x00, 0x00, 0x00]
        );
    }

    #[tokio::test]
    async fn test_length_decoding_boundaries() {
        for len in [0, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, 0x1000_0000] {
            let encoded = encode_length(len);
            let decoded = read_length(&mut encoded.as_slice()).await.unwrap();
            assert_eq!(decoded, len, "length 0x{:x}", len);
        }
    }

    #[tokio::test]
    async fn test_control_byte_rejected() {
        let bytes = [0xF8u8];
        let err = read_length(&mut bytes.as_slice()).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_sentence_framing() {
        let mut buf = Vec::new();
        write_sentence(&mut buf, &["/ip/firewall/filter/print", "=.proplist=comment"])
            .await
            .unwrap();

        assert_eq!(buf[0] as usize, "/ip/firewall/filter/print".len());
        assert_eq!(*buf.last().unwrap(), 0);

        let words = read_sentence(&mut buf.as_slice()).await.unwrap();
        assert_eq!(words, vec!["/ip/firewall/filter/print", "=.proplist=comment"]);
    }

    #[tokio::test]
    async fn test_truncated_word_is_io_error() {
        let bytes = [0x05u8, b'a', b'b'];
        let err = read_word(&mut bytes.as_slice()).await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
