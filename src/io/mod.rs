mod cursor;

pub use cursor::{read_f32_be, read_i16_be, read_i32_be, read_u16_be, read_u32_be, ByteCursor};
