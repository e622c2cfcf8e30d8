
pub use module::FakeModule;
pub use pe::{minimal_pe64, PE_IMAGE_BASE, PE_SIZE_OF_IMAGE, PE_TEXT_OFFSET, PE_TEXT_RVA};
pub use runtime::FakeRuntime;
