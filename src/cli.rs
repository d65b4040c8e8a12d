use clap::ValueEnum;
use slicedl::{DigestEncoding, FileValidator};

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum DigestFormat {
    #[default]
    Hex,
    Base64,
}

impl From<DigestFormat> for DigestEncoding {
    fn from(format: DigestFormat) -> Self {
        match format {
            DigestFormat::Hex => DigestEncoding::Hex,
            DigestFormat::Base64 => DigestEncoding::Base64,
        }
    }
}

pub fn build_validator(
    digest: Option<String>,
    algorithm: HashAlgorithm,
    format: DigestFormat,
) -> Option<FileValidator> {
    digest.map(|expected| {
        let validator = match algorithm {
            HashAlgorithm::Md5 => FileValidator::md5(expected),
            HashAlgorithm::Sha256 => FileValidator::sha256(expected),
        };
        validator.with_encoding(format.into())
    })
}
