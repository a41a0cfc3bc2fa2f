use super::Backend;

/// Input file backed by an owned buffer
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The data buffer to consume
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error::OutOfBounds;

    #[test]
    fn memory() {
        let mut data = vec![0x00_u8; 112];
        data[0..4].copy_from_slice(&[0x19, 0x00, 0xFD, 0x12]);

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 112);
        assert_eq!(memory.data_slice(0, 4).unwrap(), &[0x19, 0x00, 0xFD, 0x12]);
        assert_eq!(memory.data_slice(112, 0).unwrap(), &[] as &[u8]);
        assert!(matches!(memory.data_slice(111, 2), Err(OutOfBounds)));
        assert!(matches!(memory.data_slice(usize::MAX, 1), Err(OutOfBounds)));
    }

    #[test]
    fn empty_buffer() {
        let memory = Memory::new(vec![]);

        assert_eq!(memory.len(), 0);
        assert!(memory.data_slice(0, 1).is_err());
        assert_eq!(memory.data_slice(0, 0).unwrap(), &[] as &[u8]);
    }
}
