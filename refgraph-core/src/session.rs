/*!
Persistence sessions.

A session drives one document at a time through a [`BeanFormat`]:

```text
Idle --start_writing--> Writing --end--> Idle
Idle --start_reading--> Reading --end--> Idle
```

Starting while a document is open ends that document first. Writing adapts
each top-level object into a bean (or an anti-bean when the object was
already written) and hands it to the format. Reading buffers beans until
every member of a frame is available and then resolves the frame in two
passes: all members are created and registered, then all are populated, so
references inside the frame land on the instances that already exist.
*/

use crate::annotations::{Annotations, AnnotationsBean};
use crate::bean::{Bean, BeanClass, BeanObject, Instantiated};
use crate::config::{JsonFormatConfig, SessionConfig};
use crate::context::PersistenceContext;
use crate::format::{BeanFormat, DocumentHeader, JsonFormat};
use crate::frames::Frame;
use crate::ids::RefIdGenerator;
use crate::object::{Domain, DomainClass, ObjectRef, Shared};
use crate::registry::BeanRegistry;
use crate::version::{VersionDriver, VersionRegistry};
use crate::{PersistError, Result};
use std::collections::VecDeque;
use std::fmt;
use std::io::{Read, Write};
use std::rc::Rc;
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::observability::{SessionMetrics, SessionTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Writing,
    Reading,
}

/// A bean crossing the session boundary.
#[derive(Debug)]
pub enum BeanEvent<'a> {
    Written { label: &'a str, bean: &'a dyn Bean },
    Read { bean: &'a dyn Bean },
}

impl BeanEvent<'_> {
    pub fn bean(&self) -> &dyn Bean {
        match self {
            BeanEvent::Written { bean, .. } | BeanEvent::Read { bean } => *bean,
        }
    }
}

/// Callback notified of every bean a session writes or reads.
pub trait BeanObserver {
    fn notify(&mut self, event: &BeanEvent<'_>);
}

impl<F> BeanObserver for F
where
    F: FnMut(&BeanEvent<'_>),
{
    fn notify(&mut self, event: &BeanEvent<'_>) {
        self(event)
    }
}

type EndTask = Box<dyn FnOnce()>;

/// Writes and reads object graphs as sequences of labelled beans.
pub struct PersistenceSession<F: BeanFormat> {
    format: F,
    config: SessionConfig,
    versions: VersionRegistry,
    driver: Option<Rc<dyn VersionDriver>>,
    ctx: PersistenceContext,
    state: SessionState,
    item_counter: usize,
    queue: VecDeque<Box<dyn Bean>>,
    reading_done: bool,
    read_class: Option<(&'static DomainClass, BeanClass)>,
    description: String,
    item_class: String,
    header: Option<DocumentHeader>,
    annotations: Annotations,
    end_tasks: Vec<EndTask>,
    observers: Vec<Box<dyn BeanObserver>>,
    #[cfg(feature = "metrics")]
    timer: Option<SessionTimer>,
}

impl PersistenceSession<JsonFormat> {
    /// Session over JSON documents.
    pub fn json(
        versions: VersionRegistry,
        config: SessionConfig,
        format: JsonFormatConfig,
    ) -> Result<Self> {
        Self::new(JsonFormat::new(format)?, versions, config)
    }
}

impl<F: BeanFormat> PersistenceSession<F> {
    /// Creates an idle session with its own id generator and activates the
    /// configured default version.
    ///
    /// # Errors
    /// * `PersistError::Validation` - If the configuration is invalid
    /// * `PersistError::UnknownVersion` - If no driver serves the default version
    pub fn new(format: F, versions: VersionRegistry, config: SessionConfig) -> Result<Self> {
        Self::with_generator(format, versions, config, RefIdGenerator::new())
    }

    /// Like [`PersistenceSession::new`], drawing ids from `ids`.
    ///
    /// Sessions built from clones of one generator never hand out the same id.
    pub fn with_generator(
        format: F,
        versions: VersionRegistry,
        config: SessionConfig,
        ids: RefIdGenerator,
    ) -> Result<Self> {
        config.validate()?;
        let mut session = Self {
            format,
            description: config.description.clone().unwrap_or_default(),
            item_class: config.item_class.clone().unwrap_or_default(),
            config,
            versions,
            driver: None,
            ctx: PersistenceContext::new(ids),
            state: SessionState::Idle,
            item_counter: 0,
            queue: VecDeque::new(),
            reading_done: false,
            read_class: None,
            header: None,
            annotations: Annotations::new(),
            end_tasks: Vec::new(),
            observers: Vec::new(),
            #[cfg(feature = "metrics")]
            timer: None,
        };
        let version = session.config.default_version.clone();
        session.set_version(&version)?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Id of the active version.
    pub fn version(&self) -> &str {
        self.driver
            .as_ref()
            .map(|driver| driver.version_id())
            .unwrap_or("")
    }

    pub fn versions(&self) -> &VersionRegistry {
        &self.versions
    }

    pub fn versions_mut(&mut self) -> &mut VersionRegistry {
        &mut self.versions
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn item_class(&self) -> &str {
        &self.item_class
    }

    pub fn set_item_class(&mut self, item_class: impl Into<String>) {
        self.item_class = item_class.into();
    }

    pub fn item_label(&self) -> &str {
        &self.config.item_label
    }

    /// Header of the document being read, once reading has started.
    pub fn header(&self) -> Option<&DocumentHeader> {
        self.header.as_ref()
    }

    /// Attaches `annotation` to every document written from now on,
    /// returning the annotation of the same class it replaces.
    pub fn set_annotation(&mut self, annotation: ObjectRef) -> Option<ObjectRef> {
        self.annotations.set(annotation)
    }

    pub fn get_annotation(&self, class: &DomainClass) -> Option<&ObjectRef> {
        self.annotations.get(class)
    }

    pub fn get_annotation_typed<T: Domain>(&self) -> Option<Shared<T>> {
        self.annotations.get_typed::<T>()
    }

    /// Annotations of the session; replaced by those of each document read.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    pub fn context(&self) -> &PersistenceContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut PersistenceContext {
        &mut self.ctx
    }

    pub fn registry(&self) -> &BeanRegistry {
        self.ctx.registry()
    }

    pub fn registry_mut(&mut self) -> &mut BeanRegistry {
        self.ctx.registry_mut()
    }

    pub fn generator(&self) -> &RefIdGenerator {
        self.ctx.resolver().generator()
    }

    /// Registers a bean for `class` in the active mapping, until the next
    /// version switch.
    pub fn register_bean(&mut self, class: &'static DomainClass, bean: BeanClass) {
        self.ctx.registry_mut().register(class, bean);
    }

    pub fn get_bean_class(&self, class: &'static DomainClass) -> Option<BeanClass> {
        self.ctx.registry().get_bean_class(class)
    }

    pub fn get_bean_class_by_name(&self, name: &str) -> Option<BeanClass> {
        self.ctx.registry().get_bean_class_by_name(name)
    }

    pub fn get_class(&self, name: &str) -> Option<&'static DomainClass> {
        self.ctx.registry().get_class(name)
    }

    pub fn get_object_class(&self, bean: &BeanClass) -> Option<&'static DomainClass> {
        self.ctx.registry().get_object_class(bean)
    }

    pub fn get_proxy(&self, name: &str) -> Option<&dyn Bean> {
        self.ctx.registry().get_proxy(name)
    }

    /// Activates `version_id`, rebuilding the bean mapping from its driver.
    ///
    /// Ids differing only in ASCII case name the active version.
    ///
    /// # Errors
    /// * `PersistError::Validation` - If `version_id` is empty
    /// * `PersistError::UnknownVersion` - If no driver is registered for it
    pub fn set_version(&mut self, version_id: &str) -> Result<()> {
        if version_id.trim().is_empty() {
            return Err(PersistError::validation("version id cannot be empty"));
        }
        if self.version().eq_ignore_ascii_case(version_id) {
            return Ok(());
        }

        let driver = self
            .versions
            .driver(version_id)
            .ok_or_else(|| PersistError::UnknownVersion(version_id.to_string()))?;
        let registry = self.ctx.registry_mut();
        registry.reset();
        driver.register_beans(registry);
        info!(
            requested = version_id,
            version = driver.version_id(),
            beans = registry.len(),
            "version activated"
        );
        self.driver = Some(driver);
        self.read_class = None;
        Ok(())
    }

    /// Queues `task` to run once at the next [`PersistenceSession::end`].
    pub fn register_end_task<T>(&mut self, task: T)
    where
        T: FnOnce() + 'static,
    {
        self.end_tasks.push(Box::new(task));
    }

    pub fn add_observer<O>(&mut self, observer: O)
    where
        O: BeanObserver + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn count_observers(&self) -> usize {
        self.observers.len()
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    /// Clears every cache and rewinds the id generator.
    ///
    /// Other sessions sharing the generator must not be active.
    pub fn hard_reset(&mut self) {
        self.ctx.resolver_mut().hard_reset();
    }

    /// Opens a document on `output`, ending any open document first.
    pub fn start_writing<W>(&mut self, output: W) -> Result<()>
    where
        W: Write + 'static,
    {
        self.end()?;
        self.prepare()?;
        self.item_counter = 0;
        self.state = SessionState::Writing;
        if let Err(e) = self.format.start_writing(Box::new(output)) {
            self.cleanup();
            return Err(e);
        }
        info!(version = self.version(), mime = self.format.mime_type(), "writing started");
        Ok(())
    }

    /// Opens the document in `input`, ending any open document first.
    ///
    /// The version and frames recorded in the document's header are
    /// activated before the first item is read, and the header's annotations
    /// replace the session's.
    pub fn start_reading<R>(&mut self, input: R) -> Result<()>
    where
        R: Read + 'static,
    {
        self.end()?;
        self.prepare()?;
        self.reading_done = false;
        self.state = SessionState::Reading;

        let opened = self
            .format
            .start_reading(Box::new(input))
            .and_then(|header| {
                self.set_version(&header.version)?;
                self.annotations = self.restore_annotations(header.annotations.clone())?;
                Ok(header)
            });
        let header = match opened {
            Ok(header) => header,
            Err(e) => {
                self.cleanup();
                return Err(e);
            }
        };

        self.ctx.resolver_mut().set_frames(header.frames.clone());
        self.description = header.description.clone();
        self.item_class = header.item_class.clone();
        info!(
            version = self.version(),
            frames = header.frames.len(),
            annotations = self.annotations.len(),
            document = %header.document_id,
            "reading started"
        );
        self.header = Some(header);
        Ok(())
    }

    /// Writes `obj` under the next generated label.
    pub fn serialize(&mut self, obj: &ObjectRef) -> Result<()> {
        self.item_counter += 1;
        let label = format!("{}{}", self.config.item_label, self.item_counter);
        self.serialize_named(obj, &label)
    }

    /// Writes `obj` under `label`.
    ///
    /// An object already written in this session becomes an anti-bean. An
    /// object whose class has no bean is skipped; the registry logs it.
    ///
    /// # Errors
    /// * `PersistError::InvalidState` - If the session is not writing
    pub fn serialize_named(&mut self, obj: &ObjectRef, label: &str) -> Result<()> {
        if self.state != SessionState::Writing {
            return Err(PersistError::invalid_state(
                "serialize requires a session started for writing",
            ));
        }

        let Some(owner) = self.ctx.registry().get_bean_owner(obj.class()) else {
            debug!(class = obj.class().name(), label, "object skipped");
            return Ok(());
        };
        let anti = self.ctx.is_serialized(obj);
        let bean = if anti {
            let ref_id = self.ctx.ref_id_for_object(obj);
            match self.ctx.create_anti_bean(obj.class(), ref_id)? {
                Some(bean) => bean,
                None => return Ok(()),
            }
        } else {
            let cached = self.ctx.uncache_bean(obj);
            let mut bean = match cached {
                Some(bean) => bean,
                None => match self.ctx.create_bean_for(obj.class())? {
                    Some(bean) => bean,
                    None => {
                        debug!(class = obj.class().name(), label, "object skipped");
                        return Ok(());
                    }
                },
            };
            let ref_id = bean.ref_id();
            self.ctx.resolver_mut().set_root_id(ref_id);
            self.ctx.set_ref_id_for_object(obj, ref_id)?;
            bean.set(obj, &mut self.ctx)?;
            self.ctx.set_serialized(obj);
            bean
        };

        self.notify(&BeanEvent::Written {
            label,
            bean: bean.as_ref(),
        });
        self.format.write_bean(bean.as_ref(), owner.name(), label)?;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = SessionMetrics::global() {
            metrics.record_written(anti);
        }
        debug!(label, ref_id = %bean.ref_id(), anti, "bean written");
        Ok(())
    }

    /// Reads the next object.
    ///
    /// Items are decoded with the bean of the class they were written as;
    /// `class` only serves items that do not record one. Returns `None` once
    /// the document is exhausted; the session has ended by then.
    ///
    /// # Errors
    /// * `PersistError::InvalidState` - If the session is not reading
    /// * `PersistError::UnregisteredClass` - If an item's class has no bean
    pub fn deserialize(&mut self, class: &'static DomainClass) -> Result<Option<ObjectRef>> {
        if self.state != SessionState::Reading {
            return Err(PersistError::invalid_state(
                "deserialize requires a session started for reading",
            ));
        }

        loop {
            let Some(head) = self.queue.front() else {
                if self.reading_done {
                    self.end()?;
                    return Ok(None);
                }
                if let Some(bean) = self.next_bean(class)? {
                    self.enqueue(bean);
                }
                continue;
            };

            let ref_id = head.ref_id();
            let target = ref_id.target();
            if !target.is_none() {
                if let Some(obj) = self.ctx.object(target) {
                    self.queue.pop_front();
                    self.ctx.resolver_mut().uncache_bean_by_id(ref_id);
                    self.ctx.resolver_mut().release_object(&obj);
                    return Ok(Some(obj));
                }
            }

            let frame = self
                .ctx
                .resolver()
                .frame(ref_id)
                .or_else(|| self.ctx.resolver().frame(target))
                .cloned();
            if let Some(frame) = frame {
                self.resolve_frame(class, &frame)?;
                continue;
            }

            let Some(mut bean) = self.queue.pop_front() else {
                continue;
            };
            self.ctx.resolver_mut().uncache_bean_by_id(ref_id);
            self.ctx.resolver_mut().set_root_id(ref_id);
            match bean.get(&mut self.ctx)? {
                Some(obj) => {
                    self.ctx.resolver_mut().release_object(&obj);
                    return Ok(Some(obj));
                }
                None => warn!(bean = bean.bean_name(), %ref_id, "bean produced no object, skipped"),
            }
        }
    }

    /// Typed [`PersistenceSession::deserialize`].
    ///
    /// # Errors
    /// * `PersistError::TypeMismatch` - If the next object is not a `T`
    pub fn deserialize_typed<T: Domain>(&mut self) -> Result<Option<Shared<T>>> {
        match self.deserialize(T::domain_class())? {
            Some(obj) => downcast::<T>(&obj).map(Some),
            None => Ok(None),
        }
    }

    /// Closes the open document.
    ///
    /// Writing: objects that were referenced but never written go out as
    /// trailing items, frames are computed and the document is completed.
    /// Then, for both directions, end tasks run once, session caches are
    /// cleared (the id generator keeps counting) and the default version is
    /// re-activated. Cleanup happens even when completing the document fails;
    /// the first error is returned.
    pub fn end(&mut self) -> Result<()> {
        let completed = match self.state {
            SessionState::Idle => return Ok(()),
            SessionState::Writing => self.finish_writing(),
            SessionState::Reading => {
                self.reading_done = true;
                self.format.end_reading()
            }
        };
        let state = self.state;

        let tasks = std::mem::take(&mut self.end_tasks);
        let task_count = tasks.len();
        for task in tasks {
            task();
        }

        self.cleanup();
        let version = self.config.default_version.clone();
        let restored = self.set_version(&version);

        #[cfg(feature = "metrics")]
        if let Some(timer) = self.timer.take() {
            timer.finish();
        }
        info!(?state, end_tasks = task_count, ok = completed.is_ok(), "session ended");
        completed.and(restored)
    }

    /// Encodes a single object on its own, outside any document.
    ///
    /// Caches are cleared before and after, so nothing is shared with other
    /// calls; objects reached only through reference beans are not included.
    ///
    /// # Errors
    /// * `PersistError::InvalidState` - If a document is open
    /// * `PersistError::UnregisteredClass` - If the object's class has no bean
    pub fn write_object(&mut self, obj: &ObjectRef) -> Result<String> {
        self.require_idle("write_object")?;
        self.ctx.resolver_mut().reset();

        let result = self.write_single(obj);
        self.ctx.resolver_mut().reset();
        result
    }

    /// Decodes a single object written by [`PersistenceSession::write_object`].
    pub fn read_object(
        &mut self,
        content: &str,
        class: &'static DomainClass,
    ) -> Result<Option<ObjectRef>> {
        self.require_idle("read_object")?;
        self.ctx.resolver_mut().reset();

        let result = self.read_single(content, class);
        self.ctx.resolver_mut().reset();
        result
    }

    pub fn read_object_typed<T: Domain>(&mut self, content: &str) -> Result<Option<Shared<T>>> {
        match self.read_object(content, T::domain_class())? {
            Some(obj) => downcast::<T>(&obj).map(Some),
            None => Ok(None),
        }
    }

    fn write_single(&mut self, obj: &ObjectRef) -> Result<String> {
        let mut bean = self
            .ctx
            .create_bean_for(obj.class())?
            .ok_or_else(|| PersistError::UnregisteredClass(obj.class().name().to_string()))?;
        let ref_id = bean.ref_id();
        self.ctx.resolver_mut().set_root_id(ref_id);
        self.ctx.set_ref_id_for_object(obj, ref_id)?;
        bean.set(obj, &mut self.ctx)?;

        self.notify(&BeanEvent::Written {
            label: "",
            bean: bean.as_ref(),
        });
        self.format.write_bean_to_string(bean.as_ref())
    }

    fn read_single(&mut self, content: &str, class: &'static DomainClass) -> Result<Option<ObjectRef>> {
        let bean_class = self
            .ctx
            .bean_class(class)
            .ok_or_else(|| PersistError::UnregisteredClass(class.name().to_string()))?;
        let mut bean = self.format.read_bean_from_string(content, &bean_class)?;
        self.notify(&BeanEvent::Read { bean: bean.as_ref() });

        self.ctx.resolver_mut().cache_bean_by_id(bean.clone_bean());
        self.ctx.resolver_mut().set_root_id(bean.ref_id());
        bean.get(&mut self.ctx)
    }

    fn require_idle(&self, operation: &str) -> Result<()> {
        if self.state == SessionState::Idle {
            Ok(())
        } else {
            Err(PersistError::invalid_state(format!(
                "{operation} cannot run while a document is open ({:?})",
                self.state
            )))
        }
    }

    /// Common part of both `start_*` calls.
    fn prepare(&mut self) -> Result<()> {
        self.ctx.resolver_mut().reset();
        self.queue.clear();
        self.header = None;
        let version = self.config.default_version.clone();
        self.set_version(&version)?;
        #[cfg(feature = "metrics")]
        {
            self.timer = Some(SessionTimer::start());
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        self.queue.clear();
        self.read_class = None;
        self.ctx.resolver_mut().reset();
        self.state = SessionState::Idle;
    }

    fn finish_writing(&mut self) -> Result<()> {
        loop {
            let deferred = self.ctx.resolver_mut().take_deferred();
            if deferred.is_empty() {
                break;
            }
            for obj in deferred {
                if !self.ctx.is_serialized(&obj) {
                    debug!(class = obj.class().name(), "writing referenced object");
                    self.serialize(&obj)?;
                }
            }
        }

        self.ctx.resolver_mut().update_frames()?;
        let frames = self.ctx.resolver().frames();
        let annotations = self.encode_annotations()?;
        let header = DocumentHeader::new(self.version())
            .with_description(self.description.clone())
            .with_item_class(self.item_class.clone())
            .with_frames(frames)
            .with_annotations(annotations);
        self.format.end_writing(header)
    }

    /// Header form of the session's annotations, embedded apart from the
    /// document's items.
    fn encode_annotations(&mut self) -> Result<Option<serde_json::Value>> {
        if self.annotations.is_empty() {
            return Ok(None);
        }
        self.ctx.resolver_mut().reset();
        let bean = AnnotationsBean::of(&self.annotations, &mut self.ctx)?;
        self.ctx.resolver_mut().reset();
        debug!(annotations = bean.len(), "annotations written");
        Ok(Some(serde_json::to_value(&bean)?))
    }

    fn restore_annotations(&mut self, value: Option<serde_json::Value>) -> Result<Annotations> {
        let Some(value) = value else {
            return Ok(Annotations::new());
        };
        let mut bean: AnnotationsBean = serde_json::from_value(value)?;
        let restored = bean.restore(&mut self.ctx);
        self.ctx.resolver_mut().reset();
        restored
    }

    /// Bean class used to decode items requested as `class`.
    fn read_bean_class(&mut self, class: &'static DomainClass) -> Result<BeanClass> {
        if let Some((cached, bean_class)) = self.read_class {
            if cached == class {
                return Ok(bean_class);
            }
        }
        let bean_class = self
            .ctx
            .bean_class(class)
            .ok_or_else(|| PersistError::UnregisteredClass(class.name().to_string()))?;
        self.read_class = Some((class, bean_class));
        Ok(bean_class)
    }

    fn next_bean(&mut self, class: &'static DomainClass) -> Result<Option<Box<dyn Bean>>> {
        if self.reading_done {
            return Ok(None);
        }
        let bean_class = match self.format.next_class().map(str::to_owned) {
            Some(name) => self
                .ctx
                .registry()
                .get_bean_class_by_name(&name)
                .ok_or(PersistError::UnregisteredClass(name))?,
            None => self.read_bean_class(class)?,
        };
        let Some(bean) = self.format.read_bean(&bean_class, &self.config.item_label)? else {
            self.reading_done = true;
            return Ok(None);
        };

        self.notify(&BeanEvent::Read { bean: bean.as_ref() });
        #[cfg(feature = "metrics")]
        if let Some(metrics) = SessionMetrics::global() {
            metrics.record_read();
        }
        debug!(bean = bean.bean_name(), ref_id = %bean.ref_id(), "bean read");
        Ok(Some(bean))
    }

    fn enqueue(&mut self, bean: Box<dyn Bean>) {
        self.ctx.resolver_mut().cache_bean_by_id(bean.clone_bean());
        self.queue.push_back(bean);
    }

    /// Buffers the rest of `frame` and materializes all of its members.
    fn resolve_frame(&mut self, class: &'static DomainClass, frame: &Frame) -> Result<()> {
        while !self.ctx.resolver().is_frame_available(frame) {
            match self.next_bean(class)? {
                Some(bean) => self.enqueue(bean),
                None => {
                    return Err(PersistError::broken_reference(format!(
                        "document ended before frame {frame:?} was complete"
                    )))
                }
            }
        }

        // Create and register every member first
        let mut created: Vec<(usize, ObjectRef)> = Vec::new();
        for (index, bean) in self.queue.iter_mut().enumerate() {
            let ref_id = bean.ref_id();
            if !frame.contains(&ref_id) {
                continue;
            }
            self.ctx.resolver_mut().uncache_bean_by_id(ref_id);
            if ref_id.is_anti() {
                continue;
            }
            self.ctx.resolver_mut().set_root_id(ref_id);
            if let Instantiated::Created(obj) = bean.instantiate(&mut self.ctx)? {
                created.push((index, obj));
            }
        }

        // Then fill them in, now that every member can be referenced
        for (index, obj) in &created {
            if let Some(bean) = self.queue.get_mut(*index) {
                self.ctx.resolver_mut().set_root_id(bean.ref_id());
                bean.populate(obj, &mut self.ctx)?;
            }
        }

        self.ctx.resolver_mut().remove_frame(frame);
        #[cfg(feature = "metrics")]
        if let Some(metrics) = SessionMetrics::global() {
            metrics.record_frame(frame.len());
        }
        debug!(roots = frame.len(), created = created.len(), "frame resolved");
        Ok(())
    }

    fn notify(&mut self, event: &BeanEvent<'_>) {
        for observer in &mut self.observers {
            observer.notify(event);
        }
    }
}

impl<F: BeanFormat> fmt::Debug for PersistenceSession<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceSession")
            .field("state", &self.state)
            .field("version", &self.version())
            .field("item_label", &self.config.item_label)
            .field("pending", &self.queue.len())
            .finish()
    }
}

fn downcast<T: Domain>(obj: &ObjectRef) -> Result<Shared<T>> {
    obj.downcast::<T>().ok_or(PersistError::TypeMismatch {
        expected: T::domain_class().name(),
        actual: obj.class().name(),
    })
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
