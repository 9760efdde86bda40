//! Known unpacking tools and the formats each one declares

use super::traits::FormatSupport;
use serde::{Deserialize, Serialize};

/// A tool nestex knows how to drive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiverKind {
    /// The `7z` command line tool
    SevenZip,
    /// The `unar` command line tool
    Unar,
    /// The `pea` command line tool shipped with PeaZip
    #[serde(rename = "peazip")]
    PeaZip,
    /// In-process ZIP decoder
    BuiltinZip,
    /// In-process 7z decoder
    BuiltinSevenZip,
}

impl ArchiverKind {
    /// Every kind, in declaration order
    pub const ALL: [ArchiverKind; 5] = [
        ArchiverKind::SevenZip,
        ArchiverKind::Unar,
        ArchiverKind::PeaZip,
        ArchiverKind::BuiltinZip,
        ArchiverKind::BuiltinSevenZip,
    ];

    /// Configuration name of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiverKind::SevenZip => "seven_zip",
            ArchiverKind::Unar => "unar",
            ArchiverKind::PeaZip => "peazip",
            ArchiverKind::BuiltinZip => "builtin_zip",
            ArchiverKind::BuiltinSevenZip => "builtin_seven_zip",
        }
    }

    /// Executable searched on `PATH`, `None` for in-process decoders
    pub fn executable(self) -> Option<&'static str> {
        match self {
            ArchiverKind::SevenZip => Some("7z"),
            ArchiverKind::Unar => Some("unar"),
            ArchiverKind::PeaZip => Some("pea"),
            ArchiverKind::BuiltinZip | ArchiverKind::BuiltinSevenZip => None,
        }
    }

    /// Formats the kind declares, whether or not it is installed
    pub fn formats(self) -> FormatSupport {
        match self {
            ArchiverKind::SevenZip => {
                FormatSupport::from_lists(SEVEN_ZIP_MIME_TYPES, SEVEN_ZIP_EXTENSIONS)
            }
            ArchiverKind::Unar => FormatSupport::from_lists(UNAR_MIME_TYPES, UNAR_EXTENSIONS),
            ArchiverKind::PeaZip => FormatSupport::from_lists(PEAZIP_MIME_TYPES, PEAZIP_EXTENSIONS),
            ArchiverKind::BuiltinZip => {
                FormatSupport::from_lists(BUILTIN_ZIP_MIME_TYPES, BUILTIN_ZIP_EXTENSIONS)
            }
            ArchiverKind::BuiltinSevenZip => {
                FormatSupport::from_lists(&["application/x-7z-compressed"], &["7z"])
            }
        }
    }
}

impl std::fmt::Display for ArchiverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArchiverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "seven_zip" | "7z" | "7zip" => Ok(ArchiverKind::SevenZip),
            "unar" => Ok(ArchiverKind::Unar),
            "peazip" | "pea" => Ok(ArchiverKind::PeaZip),
            "builtin_zip" => Ok(ArchiverKind::BuiltinZip),
            "builtin_seven_zip" => Ok(ArchiverKind::BuiltinSevenZip),
            _ => Err(format!(
                "unknown archiver '{s}' (expected one of: seven_zip, unar, peazip, builtin_zip, builtin_seven_zip)"
            )),
        }
    }
}

/// Archive formats that are recognised but no known tool unpacks
///
/// Files in these formats are classified as archives and end up with a
/// `NO_ARCHIVER` warning.
pub fn unsupported_formats() -> FormatSupport {
    FormatSupport::from_lists(
        &["application/x-lzip", "application/x-lz4", "application/vnd.bzip3"],
        &["lz", "lz4", "bz3"],
    )
}

const SEVEN_ZIP_EXTENSIONS: &[&str] = &[
    "7z", "s7z", "apk", "bz2", "tbz2", "crx", "xpi", "deb", "gz", "tgz", "ipa", "jar", "ear",
    "war", "lzma", "cab", "docx", "docm", "pptx", "pptm", "xlsx", "xlsm", "emsix", "emsixbundle",
    "msix", "appinstaller", "appx", "appxbundle", "msixbundle", "z", "taz", "tar", "zip", "zipx",
    "appimage", "dmg", "img", "arj", "cpio", "cramfs", "raw", "alz", "ext", "ext2", "ext3", "ext4",
    "xar", "pkg", "fat", "gpt", "hfs", "hfsx", "iso", "lha", "lhz", "mbr", "chm", "chw", "chi",
    "chq", "msi", "msp", "vhd", "vhdx", "ntfs", "nsi", "exe", "nsis", "qcow2", "qcow", "qcow2c",
    "rpm", "rar", "r00", "sqfs", "sfs", "sqsh", "squashfs", "scap", "uefif", "udf", "edb", "edp",
    "edr", "a", "ar", "lib", "vdi", "vmdk", "wim", "swm", "esd", "xz", "txz",
];

const SEVEN_ZIP_MIME_TYPES: &[&str] = &[
    "application/x-7z-compressed",
    "application/vnd.android.package-archive",
    "application/x-bzip2",
    "application/x-chrome-extension",
    "application/x-google-chrome-extension",
    "application/x-xpinstall",
    "application/vnd.debian.binary-package",
    "application/gzip",
    "application/java-archive",
    "application/x-lzma",
    "application/vnd.ms-cab-compressed",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/msix",
    "application/appinstaller",
    "application/appx",
    "application/appxbundle",
    "application/msixbundle",
    "application/x-compress",
    "application/x-tar",
    "application/zip",
    "application/x-apple-diskimage",
    "application/x-arj",
    "application/x-cpio",
    "application/vnd.efi.img",
    "application/x-alz-compressed",
    "application/x-xar",
    "application/x-iso9660-image",
    "application/x-lzh",
    "application/vnd.ms-htmlhelp",
    "application/x-ole-storage",
    "application/x-vhd",
    "text/x-nsis",
    "application/x-qemu-disk",
    "application/x-rpm",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/vnd.squashfs",
    "application/x-archive",
    "application/x-unix-archive",
    "application/x-virtualbox-vdi",
    "application/x-vmdk-disk",
    "application/x-ms-wim",
    "application/x-xz",
];

const UNAR_EXTENSIONS: &[&str] = &[
    "appinstaller", "appx", "appxbundle", "gz", "tgz", "emsix", "emsixbundle", "msix",
    "msixbundle", "apk", "deb", "cab", "pptx", "pptm", "xlsx", "xlsm", "docx", "docm", "7z", "s7z",
    "ace", "alz", "arc", "pak", "a", "ar", "lib", "arj", "bz2", "tbz2", "crx", "z", "taz", "cpio",
    "iso", "img", "lha", "lhz", "lzma", "msi", "msp", "rar", "r00", "sit", "sitx", "tar", "xar",
    "pkg", "xpi", "xz", "txz", "zoo", "zip", "zipx", "aar", "nsi", "exe", "nsis", "udf", "edb",
    "edp", "edr",
];

const UNAR_MIME_TYPES: &[&str] = &[
    "application/appinstaller",
    "application/appx",
    "application/appxbundle",
    "application/gzip",
    "application/msix",
    "application/msixbundle",
    "application/vnd.android.package-archive",
    "application/vnd.debian.binary-package",
    "application/vnd.ms-cab-compressed",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/x-7z-compressed",
    "application/x-ace-compressed",
    "application/x-alz-compressed",
    "application/x-arc",
    "application/x-archive",
    "application/x-unix-archive",
    "application/x-arj",
    "application/x-bzip2",
    "application/x-chrome-extension",
    "application/x-google-chrome-extension",
    "application/x-compress",
    "application/x-cpio",
    "application/x-freearc",
    "application/x-iso9660-image",
    "application/x-lzh",
    "application/x-lzma",
    "application/x-ole-storage",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/x-stuffit",
    "application/x-sit",
    "application/x-stuffitx",
    "application/x-sitx",
    "application/x-tar",
    "application/x-xar",
    "application/x-xpinstall",
    "application/x-xz",
    "application/x-zoo",
    "application/zip",
    "text/x-nsis",
];

const PEAZIP_EXTENSIONS: &[&str] = &[
    "appinstaller", "appx", "appxbundle", "gz", "tgz", "jar", "ear", "war", "emsix",
    "emsixbundle", "msix", "msixbundle", "apk", "deb", "cab", "chm", "chw", "chi", "chq", "pptx",
    "pptm", "xlsx", "xlsm", "docx", "docm", "7z", "s7z", "ace", "dmg", "img", "arc", "pak", "arj",
    "br", "bz2", "tbz2", "crx", "z", "taz", "cpio", "iso", "lzma", "wim", "swm", "esd", "msi",
    "msp", "rar", "r00", "rpm", "tar", "vhd", "vhdx", "xar", "pkg", "xpi", "xz", "txz", "ipa",
    "zip", "zipx", "aar", "zst",
];

const PEAZIP_MIME_TYPES: &[&str] = &[
    "application/appinstaller",
    "application/appx",
    "application/appxbundle",
    "application/gzip",
    "application/java-archive",
    "application/msix",
    "application/msixbundle",
    "application/vnd.android.package-archive",
    "application/vnd.debian.binary-package",
    "application/vnd.ms-cab-compressed",
    "application/vnd.ms-htmlhelp",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/x-7z-compressed",
    "application/x-ace-compressed",
    "application/x-apple-diskimage",
    "application/x-arc",
    "application/x-arj",
    "application/x-brotli",
    "application/x-bzip2",
    "application/x-chrome-extension",
    "application/x-google-chrome-extension",
    "application/x-compress",
    "application/x-cpio",
    "application/x-freearc",
    "application/x-iso9660-image",
    "application/x-lzma",
    "application/x-ms-wim",
    "application/x-ole-storage",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/x-rpm",
    "application/x-tar",
    "application/x-vhd",
    "application/x-xar",
    "application/x-xpinstall",
    "application/x-xz",
    "application/zip",
    "application/zstd",
];

const BUILTIN_ZIP_EXTENSIONS: &[&str] = &[
    "zip", "jar", "war", "ear", "aar", "apk", "ipa", "xpi", "docx", "docm", "xlsx", "xlsm", "pptx",
    "pptm", "epub",
];

const BUILTIN_ZIP_MIME_TYPES: &[&str] = &[
    "application/zip",
    "application/java-archive",
    "application/vnd.android.package-archive",
    "application/x-xpinstall",
    "application/epub+zip",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];
