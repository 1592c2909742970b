//! Bulk I/O: whole-file read, atomic write, streaming read

use crate::provider::DiskFileSystemProvider;
use crate::stream::{CancellationToken, ReadFileStream};
use fsp_core::{FileOpenOptions, FileResource, FileWriteOptions, FsError, Result};
use std::fs::File;
use std::io::Read;
use std::sync::mpsc;
use std::thread;

impl DiskFileSystemProvider {
    /// Read the entire contents of a file
    pub fn read_file(&self, resource: &FileResource) -> Result<Vec<u8>> {
        let path = resource.as_path();
        std::fs::read(path).map_err(|e| FsError::from_io(e, path))
    }

    /// Write `content`, replacing the file
    ///
    /// Unless both `create` and `overwrite` are set the existence of the
    /// target is probed first so the caller gets a clean error before the
    /// file is touched. The descriptor is closed on every exit path.
    pub fn write_file(
        &self,
        resource: &FileResource,
        content: &[u8],
        opts: &FileWriteOptions,
    ) -> Result<()> {
        if !opts.create || !opts.overwrite {
            let exists = resource.as_path().exists();
            if exists && !opts.overwrite {
                return Err(FsError::FileExists(resource.display().to_string()));
            }
            if !exists && !opts.create {
                return Err(FsError::FileNotFound(resource.display().to_string()));
            }
        }

        let fd = self.open(
            resource,
            &FileOpenOptions {
                create: true,
                unlock: opts.unlock,
            },
        )?;

        let write_result = self.write_all(fd, content);
        let close_result = self.close(fd);

        write_result.and(close_result)
    }

    fn write_all(&self, fd: u64, content: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < content.len() {
            let count = self.write(fd, written as u64, &content[written..])?;
            if count == 0 {
                return Err(FsError::Unknown(
                    "Write made no progress".to_string(),
                ));
            }
            written += count;
        }
        Ok(())
    }

    /// Stream the file in `buffer_size` chunks from a worker thread
    ///
    /// Open errors are delivered through the stream. Cancellation stops
    /// the pump and ends the stream; the descriptor is released either
    /// way.
    pub fn read_file_stream(
        &self,
        resource: &FileResource,
        token: &CancellationToken,
    ) -> ReadFileStream {
        // Bounded: the pump stays at most one chunk ahead of the consumer,
        // so cancellation and stream drops take effect promptly
        let (tx, rx) = mpsc::sync_channel::<Result<Vec<u8>>>(1);
        let path = resource.to_path_buf();
        let buffer_size = self.config.buffer_size.max(1);
        let token = token.clone();

        thread::spawn(move || {
            let mut file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    let _ = tx.send(Err(FsError::from_io(e, &path)));
                    return;
                }
            };

            loop {
                if token.is_cancelled() {
                    break;
                }

                let mut chunk = vec![0u8; buffer_size];
                match file.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(count) => {
                        chunk.truncate(count);
                        if tx.send(Ok(chunk)).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(Err(FsError::from_io(e, &path)));
                        break;
                    }
                }
            }
        });

        ReadFileStream { rx }
    }
}
