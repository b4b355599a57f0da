// Bitmap management for inode allocation

/// Bit-per-resource allocation map over one bitmap block.
/// Bits past `size_bits` are carried along untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    data: Vec<u8>,
    size_bits: u32,
}

impl Bitmap {
    /// Wrap raw bitmap bytes, only the first `size_bits` bits are managed
    pub fn from_bytes(data: Vec<u8>, size_bits: u32) -> Self {
        let size_bits = size_bits.min(data.len() as u32 * 8);
        Self { data, size_bits }
    }

    /// Set a bit (mark as used)
    pub fn set(&mut self, index: u32) {
        if index >= self.size_bits {
            return;
        }
        let byte_index = (index / 8) as usize;
        let bit_index = (index % 8) as u8;
        self.data[byte_index] |= 1 << bit_index;
    }

    /// Check if a bit is set
    pub fn is_set(&self, index: u32) -> bool {
        if index >= self.size_bits {
            return false;
        }
        let byte_index = (index / 8) as usize;
        let bit_index = (index % 8) as u8;
        (self.data[byte_index] & (1 << bit_index)) != 0
    }

    /// First clear bit, lowest index first
    pub fn find_first_clear(&self) -> Option<u32> {
        (0..self.size_bits).find(|&i| !self.is_set(i))
    }

    /// Count free bits
    pub fn count_free(&self) -> u32 {
        (0..self.size_bits).filter(|&i| !self.is_set(i)).count() as u32
    }

    pub fn size_bits(&self) -> u32 {
        self.size_bits
    }

    /// Get bitmap data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_addressing() {
        let mut bitmap = Bitmap::from_bytes(vec![0u8; 4], 32);
        bitmap.set(0);
        bitmap.set(9);
        assert_eq!(bitmap.as_bytes(), &[0b0000_0001, 0b0000_0010, 0, 0]);
        assert!(bitmap.is_set(9));
        assert!(!bitmap.is_set(8));
    }

    #[test]
    fn test_first_fit_is_lowest_index() {
        let mut bitmap = Bitmap::from_bytes(vec![0b0000_1011, 0], 16);
        assert_eq!(bitmap.find_first_clear(), Some(2));
        bitmap.set(2);
        assert_eq!(bitmap.find_first_clear(), Some(4));
        assert_eq!(bitmap.count_free(), 16 - 4);
    }

    #[test]
    fn test_search_bounded_by_count() {
        // Only the first 3 bits are managed; bit 3 being clear does not count
        let bitmap = Bitmap::from_bytes(vec![0b0000_0111], 3);
        assert_eq!(bitmap.find_first_clear(), None);

        let mut bitmap = Bitmap::from_bytes(vec![0u8], 3);
        bitmap.set(5);
        assert_eq!(bitmap.as_bytes(), &[0]);
        assert!(!bitmap.is_set(5));
    }

    #[test]
    fn test_bytes_past_managed_range_preserved() {
        let mut bitmap = Bitmap::from_bytes(vec![0x00, 0xAB], 8);
        bitmap.set(1);
        assert_eq!(bitmap.into_bytes(), vec![0x02, 0xAB]);
    }
}
