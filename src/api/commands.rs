use super::*;

type Reply<T> = tokio::sync::oneshot::Sender<T>;

/// Commands sent from API -> Bevy
pub enum ApiCommand {
    GetMap(Reply<EditableMap>),
    EditMap(MapEdit, Reply<Result<(), String>>),
    GetPalette(Reply<Vec<String>>),
    EditPalette(PaletteRequest, Reply<Vec<String>>),
    GetStatics(Reply<Vec<String>>),
    ToggleStatic(StaticRequest, Reply<Vec<String>>),
    GetCollisions(Reply<Vec<CollisionRule>>),
    SetCollision(CollisionRequest, Reply<Result<(), String>>),
    RemoveCollision(CollisionPairRequest, Reply<bool>),
    GetEvents(Reply<BTreeMap<String, Sequence>>),
    AddEvent(Box<Sequence>, Reply<Result<String, String>>),
    UpdateEvent(String, Box<Sequence>, Reply<Result<(), String>>),
    PlaySequence(PlaySequenceRequest, Reply<Result<RunId, String>>),
    CancelSequence(RunId, Reply<bool>),
    ListSequences(Reply<Vec<RunSummary>>),
    GetFlowEdges(Reply<Result<Vec<EdgeProps>, String>>),
    AddFlowNode(Box<FlowNode>, Reply<Result<(), String>>),
    RemoveFlowNode(String, Reply<bool>),
    ConnectFlow(FlowEdge, Reply<Result<(), String>>),
    DisconnectFlow(String, Reply<bool>),
    GetPlayer(Reply<PlayerView>),
    MovePlayer(Direction, Reply<Result<MoveReport, String>>),
    /// Spend one charge of the item in a hot bar slot.
    UseItem(usize, Reply<Result<Effector, String>>),
    DropItem(usize, Reply<Option<Effector>>),
    GetRuntime(Reply<RuntimeView>),
    Runtime(RuntimeAction, Reply<RuntimeView>),
    GetLevel(Reply<LevelFile>),
    LoadLevel(Box<LevelFile>, Reply<()>),
    GetBus(Option<u64>, Reply<Vec<GameEvent>>),
}

/// Receiving end of the API channel, polled once per frame.
#[derive(Resource)]
pub struct ApiChannels {
    pub receiver: Receiver<ApiCommand>,
}
