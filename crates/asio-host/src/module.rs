use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use asio_sys::{self as ffi, DllGetClassObjectFn, Guid, IAsio, IClassFactory};
use libloading::{Library, Symbol};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::AttachError;
use crate::instance::ComDriver;

/// Parses a driver class id in its registry form, braces optional.
pub fn parse_clsid(text: &str) -> Result<Guid, uuid::Error> {
    let uuid = Uuid::parse_str(text.trim())?;
    let (data1, data2, data3, data4) = uuid.as_fields();
    Ok(Guid::new(data1, data2, data3, *data4))
}

/// Formats `clsid` the way the registry spells it.
pub fn format_clsid(clsid: &Guid) -> String {
    let uuid = Uuid::from_fields(clsid.data1, clsid.data2, clsid.data3, &clsid.data4);
    format!("{{{}}}", uuid.hyphenated()).to_uppercase()
}

/// A loaded driver module. Dropping it unloads the module, so every instance
/// created from it must be released first.
pub struct DriverModule {
    path: PathBuf,
    library: Library,
}

impl DriverModule {
    /// # Safety
    ///
    /// Loading a module runs its initialisation code.
    pub unsafe fn load(path: &Path) -> Result<Self, AttachError> {
        let library = unsafe { Library::new(path) }.map_err(|source| AttachError::ModuleLoad {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded driver module");
        Ok(Self {
            path: path.to_path_buf(),
            library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the class-factory handshake for `clsid` and returns the driver
    /// it produced. The factory is released whatever the outcome.
    ///
    /// # Safety
    ///
    /// The module must export a conforming `DllGetClassObject`.
    pub unsafe fn instantiate(&self, clsid: &Guid) -> Result<ComDriver, AttachError> {
        let get_class_object: Symbol<DllGetClassObjectFn> =
            unsafe { self.library.get(ffi::DLL_GET_CLASS_OBJECT) }.map_err(|source| {
                AttachError::MissingEntryPoint {
                    path: self.path.clone(),
                    source,
                }
            })?;

        let mut factory: *mut c_void = ptr::null_mut();
        let hresult = unsafe { get_class_object(clsid, &ffi::IID_ICLASS_FACTORY, &mut factory) };
        let factory = match NonNull::new(factory.cast::<IClassFactory>()) {
            Some(factory) if hresult >= ffi::S_OK => factory,
            _ => {
                error!(hresult, "DllGetClassObject failed");
                return Err(AttachError::ClassFactory { hresult });
            }
        };

        let mut instance: *mut c_void = ptr::null_mut();
        // Drivers expect their own class id as the interface id.
        let hresult = unsafe {
            let vtbl = &*(*factory.as_ptr()).vtbl;
            let hresult =
                (vtbl.create_instance)(factory.as_ptr(), ptr::null_mut(), clsid, &mut instance);
            (vtbl.unknown.release)(factory.as_ptr().cast());
            hresult
        };

        match NonNull::new(instance.cast::<IAsio>()) {
            Some(instance) if hresult >= ffi::S_OK => Ok(unsafe { ComDriver::from_raw(instance) }),
            _ => {
                error!(hresult, "class factory did not create a driver");
                Err(AttachError::CreateInstance { hresult })
            }
        }
    }
}

impl Drop for DriverModule {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "unloading driver module");
    }
}
