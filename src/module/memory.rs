use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// Image data backed by an owned buffer
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The data buffer to consume
    #[must_use]
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory() {
        let mut data = vec![0xCC_u8; 512];
        data[0x40..0x45].copy_from_slice(&[0x48, 0x83, 0xEC, 0x28, 0xE8]);

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 512);
        assert_eq!(memory.data()[0], 0xCC);
        assert_eq!(
            memory.data_slice(0x40, 5).unwrap(),
            &[0x48, 0x83, 0xEC, 0x28, 0xE8]
        );

        assert!(memory
            .data_slice(u32::MAX as usize, u32::MAX as usize)
            .is_err());
        assert!(memory.data_slice(0, 1024).is_err());
    }

    #[test]
    fn test_memory_empty_buffer() {
        let memory = Memory::new(vec![]);

        assert_eq!(memory.len(), 0);
        assert!(memory.data_slice(0, 1).is_err());
        assert!(memory.data_slice(1, 0).is_err());
        let empty_slice: &[u8] = &[];
        assert_eq!(memory.data_slice(0, 0).unwrap(), empty_slice);
    }

    #[test]
    fn test_memory_offset_overflow() {
        let memory = Memory::new(vec![0x00; 100]);

        assert!(matches!(
            memory.data_slice(usize::MAX, 1).unwrap_err(),
            OutOfBounds
        ));
        assert!(matches!(memory.data_slice(100, 1).unwrap_err(), OutOfBounds));
        assert!(matches!(memory.data_slice(99, 2).unwrap_err(), OutOfBounds));
    }
}
