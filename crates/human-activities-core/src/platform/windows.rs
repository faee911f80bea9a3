use std::fs::Metadata;
use std::os::windows::fs::MetadataExt;

const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

pub fn has_hidden_attribute(metadata: &Metadata) -> bool {
    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}
