use std::io::{Read, Write};

use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::pdu::reader::{read_pdu, PDU_HEADER_SIZE};
use crate::pdu::Pdu;

/// Patch the P-Data PDU header at the start of `buffer`
/// once the payload length is known.
fn setup_pdata_header(buffer: &mut Vec<u8>, is_last: bool) {
    let data_len = (buffer.len() - 12) as u32;

    // full PDU length (everything past the PDU type and reserved byte)
    let pdu_len = data_len + 4 + 2;
    buffer[2..6].copy_from_slice(&pdu_len.to_be_bytes());

    // PDV item length (data plus context id and control header)
    let pdv_len = data_len + 2;
    buffer[6..10].copy_from_slice(&pdv_len.to_be_bytes());

    // message control header: plain data, last bit set on the final PDV
    buffer[11] = if is_last { 0x02 } else { 0x00 };
}

/// A P-Data value writer.
///
/// Bytes written through the [`Write`](std::io::Write) interface
/// accumulate into a single P-DATA-TF PDU
/// and are split into further PDUs
/// whenever the peer's maximum PDU length is reached.
/// The final PDV, with the last-fragment bit set,
/// goes out on [`finish`](Self::finish) or on drop.
#[must_use]
pub struct PDataWriter<W: Write> {
    buffer: Vec<u8>,
    stream: W,
    max_data_len: u32,
}

impl<W> PDataWriter<W>
where
    W: Write,
{
    /// Construct a new P-Data value writer.
    ///
    /// `max_pdu_length` is the maximum value of the PDU-length property
    /// admitted by the peer.
    pub(crate) fn new(stream: W, presentation_context_id: u8, max_pdu_length: u32) -> Self {
        let max_data_len = max_pdata_payload(max_pdu_length);
        let mut buffer = Vec::with_capacity((max_data_len + PDU_HEADER_SIZE) as usize);
        // PDU type and reserved byte, then the length fields
        // and message control header to be patched before sending
        buffer.extend([
            0x04,
            0x00,
            0xFF,
            0xFF,
            0xFF,
            0xFF,
            0xFF,
            0xFF,
            0xFF,
            0xFF,
            presentation_context_id,
            0xFF,
        ]);

        PDataWriter {
            stream,
            max_data_len,
            buffer,
        }
    }

    /// Declare the data stream complete,
    /// emitting the final P-Data PDU.
    ///
    /// This also happens automatically when the writer is dropped.
    pub fn finish(mut self) -> std::io::Result<()> {
        self.finish_impl()
    }

    fn finish_impl(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            setup_pdata_header(&mut self.buffer, true);
            self.stream.write_all(&self.buffer)?;
            // emptied so that the drop impl does not send a second final PDV
            self.buffer.clear();
        }
        Ok(())
    }

    /// Send the buffered payload as one non-final PDU
    /// and reset the buffer to just the header.
    fn dispatch_pdu(&mut self) -> std::io::Result<()> {
        debug_assert!(self.buffer.len() >= 12);
        setup_pdata_header(&mut self.buffer, false);
        self.stream.write_all(&self.buffer)?;
        self.buffer.truncate(12);
        Ok(())
    }
}

impl<W> Write for PDataWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let total_len = self.max_data_len as usize + 12;
        if self.buffer.len() + buf.len() <= total_len {
            self.buffer.extend(buf);
            Ok(buf.len())
        } else {
            // fill the current PDU to capacity and send it,
            // leaving the remainder for subsequent writes
            let buf = &buf[..total_len - self.buffer.len()];
            self.buffer.extend(buf);
            self.dispatch_pdu()?;
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<W> Drop for PDataWriter<W>
where
    W: Write,
{
    fn drop(&mut self) {
        let _ = self.finish_impl();
    }
}

/// A P-Data value reader.
///
/// Reading through the [`Read`](std::io::Read) interface
/// collects P-DATA-TF PDUs from the peer
/// until the PDV with the last-fragment bit arrives,
/// presenting their payloads as one contiguous byte stream.
#[must_use]
pub struct PDataReader<R> {
    buffer: BytesMut,
    stream: R,
    presentation_context_id: Option<u8>,
    max_pdu_length: u32,
    last_pdu: bool,
}

impl<R> PDataReader<R> {
    pub fn new(stream: R, max_pdu_length: u32) -> Self {
        PDataReader {
            buffer: BytesMut::with_capacity(max_pdu_length as usize),
            stream,
            presentation_context_id: None,
            max_pdu_length,
            last_pdu: false,
        }
    }

    /// Declare no intention to read more PDUs from the remote node.
    ///
    /// Subsequent reads only drain the inner buffer.
    pub fn stop_receiving(&mut self) {
        self.last_pdu = true;
    }
}

impl<R> Read for PDataReader<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.buffer.is_empty() {
            if self.last_pdu {
                return Ok(0);
            }

            let msg = read_pdu(&mut self.stream, self.max_pdu_length, false)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            match msg {
                Pdu::PData { data } => {
                    for pdata_value in data {
                        self.presentation_context_id = match self.presentation_context_id {
                            None => Some(pdata_value.presentation_context_id),
                            Some(id) if id == pdata_value.presentation_context_id => Some(id),
                            Some(id) => {
                                warn!(
                                    "received P-Data value of presentation context {}, expected {}",
                                    pdata_value.presentation_context_id, id
                                );
                                Some(id)
                            }
                        };
                        self.buffer.extend_from_slice(&pdata_value.data);
                        self.last_pdu = pdata_value.is_last;
                    }
                }
                _ => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "unexpected PDU type in P-Data stream",
                    ))
                }
            }
        }

        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.advance(n);
        Ok(n)
    }
}

/// The largest PDV payload that fits in a PDU
/// with the given length property,
/// accounting for the PDV item length, context id
/// and message control header.
#[inline]
fn max_pdata_payload(pdu_len: u32) -> u32 {
    pdu_len - 4 - 2
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use crate::pdu::reader::{read_pdu, MINIMUM_PDU_SIZE, PDU_HEADER_SIZE};
    use crate::pdu::{PDataValue, PDataValueType, Pdu};
    use crate::pdu::writer::write_pdu;

    use super::{PDataReader, PDataWriter};

    #[test]
    fn small_payload_goes_out_as_one_final_pdu() {
        let presentation_context_id = 12;

        let mut buf = Vec::new();
        {
            let mut writer = PDataWriter::new(&mut buf, presentation_context_id, MINIMUM_PDU_SIZE);
            writer.write_all(&(0..64).collect::<Vec<u8>>()).unwrap();
            writer.finish().unwrap();
        }

        let mut cursor = &buf[..];
        let pdu = read_pdu(&mut cursor, MINIMUM_PDU_SIZE, true).unwrap();
        match pdu {
            Pdu::PData { data } => {
                assert_eq!(data.len(), 1);
                let pdv = &data[0];
                assert_eq!(pdv.value_type, PDataValueType::Data);
                assert_eq!(pdv.presentation_context_id, presentation_context_id);
                assert!(pdv.is_last);
                assert_eq!(pdv.data, (0..64).collect::<Vec<u8>>());
            }
            pdu => panic!("expected PData, got {:?}", pdu),
        }
        assert_eq!(cursor.len(), 0);
    }

    #[test]
    fn large_payload_is_split_at_the_pdu_limit() {
        let presentation_context_id = 32;
        let payload: Vec<_> = (0..9000).map(|x: u32| x as u8).collect();

        let mut buf = Vec::new();
        {
            let mut writer = PDataWriter::new(&mut buf, presentation_context_id, MINIMUM_PDU_SIZE);
            writer.write_all(&payload).unwrap();
            writer.finish().unwrap();
        }

        let mut cursor = &buf[..];
        let pdu_1 = read_pdu(&mut cursor, MINIMUM_PDU_SIZE, true).unwrap();
        let pdu_2 = read_pdu(&mut cursor, MINIMUM_PDU_SIZE, true).unwrap();
        let pdu_3 = read_pdu(&mut cursor, MINIMUM_PDU_SIZE, true).unwrap();
        assert_eq!(cursor.len(), 0);

        match (pdu_1, pdu_2, pdu_3) {
            (Pdu::PData { data: d1 }, Pdu::PData { data: d2 }, Pdu::PData { data: d3 }) => {
                assert_eq!(d1.len(), 1);
                assert_eq!(d2.len(), 1);
                assert_eq!(d3.len(), 1);
                let (d1, d2, d3) = (&d1[0], &d2[0], &d3[0]);

                assert!(!d1.is_last);
                assert!(!d2.is_last);
                assert!(d3.is_last);

                // the first two PDUs are filled to the limit
                assert_eq!(d1.data.len(), (MINIMUM_PDU_SIZE - PDU_HEADER_SIZE) as usize);
                assert_eq!(d2.data.len(), (MINIMUM_PDU_SIZE - PDU_HEADER_SIZE) as usize);
                assert_eq!(d1.data.len() + d2.data.len() + d3.data.len(), 9000);

                let mut all_data: Vec<u8> = Vec::new();
                all_data.extend(&d1.data);
                all_data.extend(&d2.data);
                all_data.extend(&d3.data);
                assert_eq!(all_data, payload);
            }
            x => panic!("expected 3 PData PDUs, got {:?}", x),
        }
    }

    #[test]
    fn reader_reassembles_multiple_pdus() {
        let presentation_context_id = 32;
        let payload: Vec<_> = (0..9000).map(|x: u32| x as u8).collect();

        let mut pdu_stream = Vec::new();
        for (chunk, is_last) in [
            (&payload[0..3000], false),
            (&payload[3000..6000], false),
            (&payload[6000..], true),
        ] {
            write_pdu(
                &mut pdu_stream,
                &Pdu::PData {
                    data: vec![PDataValue {
                        value_type: PDataValueType::Data,
                        data: chunk.to_owned(),
                        presentation_context_id,
                        is_last,
                    }],
                },
            )
            .unwrap();
        }

        let mut buf = Vec::new();
        let mut reader = PDataReader::new(&pdu_stream[..], MINIMUM_PDU_SIZE);
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, payload);
    }
}
