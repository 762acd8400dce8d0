//! Linear access to XRAM and SPI flash
//!
//! Reads are split into window-sized transfers and concatenated in address
//! order. Nothing here is atomic across windows.

use crate::error::{Error, Result};
use crate::hub::Hub;
use crate::protocol::{windows, Command, ControlRequest, FLASH_ADDR_LIMIT, XRAM_ADDR_LIMIT};
use crate::transport::ControlTransport;

/// Address space reachable through the vendor commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Controller XRAM (16-bit addresses)
    Xram,
    /// SPI configuration flash (20-bit addresses)
    Flash,
}

impl Region {
    /// One past the highest addressable byte
    pub const fn limit(self) -> u32 {
        match self {
            Region::Xram => XRAM_ADDR_LIMIT,
            Region::Flash => FLASH_ADDR_LIMIT,
        }
    }

    /// Reject ranges the address packing cannot express
    pub fn check_range(self, addr: u32, len: usize) -> Result<()> {
        let end = addr as u64 + len as u64;
        if end > self.limit() as u64 {
            return Err(Error::InvalidArgument(format!(
                "{:?} range 0x{:05x}+0x{:x} exceeds 0x{:05x}",
                self,
                addr,
                len,
                self.limit()
            )));
        }
        Ok(())
    }

    fn request(self, command: Command, addr: u32) -> ControlRequest {
        match self {
            Region::Xram => ControlRequest::xram(command, addr),
            Region::Flash => ControlRequest::flash(command, addr),
        }
    }

    fn read_command(self) -> Command {
        match self {
            Region::Xram => Command::ReadXram,
            Region::Flash => Command::Read,
        }
    }
}

impl<T: ControlTransport> Hub<T> {
    /// Read `len` bytes of `region` starting at `addr`
    pub fn read_linear(&mut self, region: Region, addr: u32, len: usize) -> Result<Vec<u8>> {
        self.read_linear_with(region, addr, len, |_| {})
    }

    /// Like [`Hub::read_linear`], reporting the running byte count after
    /// every window
    pub fn read_linear_with<F>(
        &mut self,
        region: Region,
        addr: u32,
        len: usize,
        mut progress: F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(usize),
    {
        region.check_range(addr, len)?;

        let mut data = Vec::with_capacity(len);
        for (win_addr, win_len) in windows(addr, len) {
            self.check_cancelled()?;
            let req = region.request(region.read_command(), win_addr);
            let chunk = self.control_read_exact(req, win_len)?;
            data.extend_from_slice(&chunk[..win_len]);
            progress(data.len());
        }
        Ok(data)
    }

    /// Write `data` to `region` starting at `addr`
    ///
    /// XRAM is written one byte per transfer. Flash is written window by
    /// window with a busy-wait after each. Nothing is read back.
    pub fn write_linear(&mut self, region: Region, addr: u32, data: &[u8]) -> Result<()> {
        match region {
            Region::Xram => self.write_xram(addr, data),
            Region::Flash => self.write_flash(addr, data),
        }
    }

    /// Read XRAM
    pub fn read_xram(&mut self, addr: u32, len: usize) -> Result<Vec<u8>> {
        self.read_linear(Region::Xram, addr, len)
    }

    /// Write XRAM, one byte per transfer (the hardware accepts nothing wider)
    pub fn write_xram(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        Region::Xram.check_range(addr, data.len())?;
        for (i, &byte) in data.iter().enumerate() {
            let req = ControlRequest::xram(Command::WriteXram, addr + i as u32);
            self.control_write(req, &[byte])?;
        }
        Ok(())
    }

    /// Read SPI flash
    pub fn read_flash(&mut self, addr: u32, len: usize) -> Result<Vec<u8>> {
        self.read_linear(Region::Flash, addr, len)
    }

    /// Write SPI flash window by window, waiting for the busy bit after each
    ///
    /// The flash must have been erased beforehand (see [`Hub::erase_chip`]).
    /// A failure leaves already written windows in place.
    pub fn write_flash(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.write_flash_with(addr, data, |_| {})
    }

    /// Like [`Hub::write_flash`], reporting the running byte count after
    /// every window
    pub fn write_flash_with<F>(&mut self, addr: u32, data: &[u8], mut progress: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        Region::Flash.check_range(addr, data.len())?;

        let mut written = 0;
        for (win_addr, win_len) in windows(addr, data.len()) {
            self.check_cancelled()?;
            let chunk = &data[written..written + win_len];
            log::debug!(
                "Writing flash 0x{:05x}..0x{:05x}",
                win_addr,
                win_addr as usize + win_len
            );
            self.control_write(ControlRequest::flash(Command::Write, win_addr), chunk)?;
            self.wait_busy()?;
            written += win_len;
            progress(written);
        }
        Ok(())
    }

    /// Read back `data.len()` bytes at `addr` and compare against `data`
    pub fn verify_flash(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.verify_flash_with(addr, data, |_| {})
    }

    /// Like [`Hub::verify_flash`], reporting read progress
    pub fn verify_flash_with<F>(&mut self, addr: u32, data: &[u8], progress: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        let actual = self.read_linear_with(Region::Flash, addr, data.len(), progress)?;
        match first_mismatch(data, &actual) {
            Some(offset) => {
                log::error!("Verification failed at 0x{:05x}", addr as usize + offset);
                Err(Error::VerificationError {
                    addr: addr + offset as u32,
                    expected: data[offset],
                    found: actual[offset],
                })
            }
            None => Ok(()),
        }
    }
}

fn first_mismatch(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected.iter().zip(actual).position(|(a, b)| a != b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::transport::mock::{fill, MockTransport, Transfer};

    fn hub() -> Hub<MockTransport> {
        Hub::new(MockTransport::new(), 0x05e3, 0x0610, HubConfig::default())
    }

    #[test]
    fn test_single_window_read() {
        let mut hub = hub();
        let data = hub.read_flash(0x1_2000, 0x100).unwrap();
        assert_eq!(data.len(), 0x100);
        assert_eq!(
            hub.transport().log,
            vec![Transfer::In {
                request: 0x82,
                value: 0x1000,
                index: 0x2000,
                length: 0x100
            }]
        );
    }

    #[test]
    fn test_windowed_read_is_transparent() {
        let mut hub = hub();
        // Range runs past the 20-bit limit
        let err = hub.read_flash(0xF_F800, 0x1800).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(hub.transport().log.is_empty());

        let addr = 0x0_F800;
        let len = 0x2400;
        let data = hub.read_flash(addr, len).unwrap();
        let expected: Vec<u8> = (0..len).map(|i| fill(addr as usize + i)).collect();
        assert_eq!(data, expected);
        assert_eq!(
            hub.transport().log,
            vec![
                Transfer::In {
                    request: 0x82,
                    value: 0x0000,
                    index: 0xF800,
                    length: 0x800
                },
                Transfer::In {
                    request: 0x82,
                    value: 0x1000,
                    index: 0x0000,
                    length: 0x1000
                },
                Transfer::In {
                    request: 0x82,
                    value: 0x1000,
                    index: 0x1000,
                    length: 0xC00
                },
            ]
        );
    }

    #[test]
    fn test_xram_read() {
        let mut hub = hub();
        hub.transport_mut().respond(&[0xAB, 0xCD]);
        assert_eq!(hub.read_xram(0x4100, 2).unwrap(), vec![0xAB, 0xCD]);
        assert_eq!(
            hub.transport().log,
            vec![Transfer::In {
                request: 0x72,
                value: 0x04,
                index: 0x4100,
                length: 2
            }]
        );
    }

    #[test]
    fn test_xram_write_bytewise() {
        let mut hub = hub();
        hub.write_linear(Region::Xram, 0x4100, &[1, 2, 3]).unwrap();
        let expected: Vec<Transfer> = (0..3)
            .map(|i| Transfer::Out {
                request: 0x73,
                value: 0x04,
                index: 0x4100 + i,
                data: vec![i as u8 + 1],
            })
            .collect();
        assert_eq!(hub.transport().log, expected);
    }

    #[test]
    fn test_xram_out_of_range() {
        let mut hub = hub();
        assert!(matches!(
            hub.write_xram(0xFFFF, &[1, 2]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(hub.transport().log.is_empty());
    }

    #[test]
    fn test_flash_write_chunks_and_polls() {
        let mut hub = hub();
        let image = vec![0x5A; 0x1800];
        // Every chunk is followed by a busy poll and a final status read
        for _ in 0..2 {
            hub.transport_mut().respond(&[0x00]);
            hub.transport_mut().respond(&[0x00]);
        }
        hub.write_flash(0x1_0000, &image).unwrap();

        let outs = hub.transport().outs();
        assert_eq!(
            outs,
            vec![
                Transfer::Out {
                    request: 0x83,
                    value: 0x1000,
                    index: 0x0000,
                    data: vec![0x5A; 0x1000]
                },
                Transfer::Out {
                    request: 0x83,
                    value: 0x1000,
                    index: 0x1000,
                    data: vec![0x5A; 0x800]
                },
            ]
        );
        assert_eq!(hub.transport().ins().len(), 4);
    }

    #[test]
    fn test_short_read() {
        let mut hub = hub();
        hub.transport_mut().respond(&[0; 10]);
        assert!(matches!(
            hub.read_flash(0, 16),
            Err(Error::ShortRead {
                expected: 16,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let mut hub = hub();
        let mut image: Vec<u8> = (0..64).map(|i| fill(0x200 + i)).collect();
        assert!(hub.verify_flash(0x200, &image).is_ok());

        image[10] ^= 0xFF;
        match hub.verify_flash(0x200, &image) {
            Err(Error::VerificationError {
                addr,
                expected,
                found,
            }) => {
                assert_eq!(addr, 0x20A);
                assert_eq!(found, fill(0x20A));
                assert_eq!(expected, fill(0x20A) ^ 0xFF);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
