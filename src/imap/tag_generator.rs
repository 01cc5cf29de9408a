use std::num::Wrapping;

#[derive(Debug)]
pub struct TagGenerator {
    last_tag: Wrapping<u16>,
}

impl TagGenerator {
    pub fn next(&mut self) -> String {
        self.last_tag += 1;
        format!("{:04x}", self.last_tag)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self {
            last_tag: Wrapping(u16::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_tags_start_at_zero_and_wrap_around() {
        let mut tag_generator = TagGenerator::default();
        assert_eq!("0000", tag_generator.next());
        assert_eq!("0001", tag_generator.next());

        tag_generator.last_tag = Wrapping(u16::MAX - 1);
        assert_eq!("ffff", tag_generator.next());
        assert_eq!("0000", tag_generator.next());
    }
}
