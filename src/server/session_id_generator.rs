// Session ID generator

/// Generator of unique session IDs
pub struct SessionIdGenerator {
    /// Last generated ID
    next_id: u64,
}

impl SessionIdGenerator {
    /// Creates new SessionIdGenerator
    pub fn new() -> SessionIdGenerator {
        SessionIdGenerator { next_id: 0 }
    }

    /// Generates an unique ID for a session
    pub fn generate_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);

        self.next_id
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let mut generator = SessionIdGenerator::new();

        assert_eq!(generator.generate_id(), 1);
        assert_eq!(generator.generate_id(), 2);
        assert_eq!(generator.generate_id(), 3);
    }
}
