use std::fs::{self, DirEntry, ReadDir};
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::QuestionBankData;

pub fn read_data_dir(data_path: PathBuf) -> Result<ReadDir> {
    let data_path = fs::canonicalize(data_path)?;
    let entries = fs::read_dir(data_path)?;

    Ok(entries)
}

/// Bank files are the non-hidden .json entries; sync metadata and answer
/// records live next to them as dotfiles and are skipped.
pub fn is_bank_entry(dir_entry: &DirEntry) -> Result<bool> {
    if dir_entry.file_type()?.is_dir() {
        return Ok(false);
    }

    let name = dir_entry.file_name();
    let name = name.to_string_lossy();

    Ok(!name.starts_with('.') && name.ends_with(".json"))
}

pub fn read_dir_entry_data(dir_entry: DirEntry) -> Result<Vec<u8>> {
    if dir_entry.file_type()?.is_dir() {
        bail!("{} is a directory", dir_entry.path().display());
    };

    Ok(fs::read(dir_entry.path())?)
}

pub fn write_data(path: PathBuf, data: String) -> Result<()> {
    fs::write(path, format!("{data}\n"))?;

    Ok(())
}

pub fn load_banks_and_write_formatted(data_path: PathBuf) -> Result<Vec<QuestionBankData>> {
    let mut banks = Vec::new();

    for dir_entry in read_data_dir(data_path)? {
        let dir_entry = dir_entry?;

        if !is_bank_entry(&dir_entry)? {
            continue;
        }

        banks.push(QuestionBankData::load_and_write_formatted(dir_entry)?);
    }

    Ok(banks)
}
